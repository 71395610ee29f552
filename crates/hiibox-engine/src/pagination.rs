use sea_orm::{ConnectionTrait, DbErr, EntityTrait, FromQueryResult, PaginatorTrait as _, Select};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 100;

/// Zero-based page selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_per_page() -> u64 {
    DEFAULT_PER_PAGE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self { page, per_page }
    }

    fn clamped_per_page(&self) -> u64 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

pub(crate) async fn fetch_page<C, E, M>(
    db: &C,
    select: Select<E>,
    request: PageRequest,
) -> Result<Page<M>, DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait<Model = M>,
    M: FromQueryResult + Sized + Send + Sync + 'static,
{
    let per_page = request.clamped_per_page();
    let paginator = select.paginate(db, per_page);
    let counts = paginator.num_items_and_pages().await?;
    let items = paginator.fetch_page(request.page).await?;

    Ok(Page {
        items,
        page: request.page,
        per_page,
        total_items: counts.number_of_items,
        total_pages: counts.number_of_pages,
    })
}
