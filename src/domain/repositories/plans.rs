use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::plans::PlanEntity;

#[async_trait]
#[automock]
pub trait PlanRepository {
    async fn list_active_plans(&self) -> Result<Vec<PlanEntity>>;
    async fn find_active_plan_by_slug(&self, slug: &str) -> Result<Option<PlanEntity>>;
}
