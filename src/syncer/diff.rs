use crate::collection::{SourceCollection, TargetCollection};
use crate::models::{SourceItem, TargetRecord};

/// Mutations needed to make the database mirror the stars.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    pub to_create: Vec<SourceItem>,
    pub to_archive: Vec<TargetRecord>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_archive.is_empty()
    }
}

/// Starred repos without a page are created; pages whose repo is no longer
/// starred are archived. Both lists keep collection order.
pub fn diff(source: &SourceCollection, target: &TargetCollection) -> SyncPlan {
    let to_create = source
        .iter()
        .filter(|repo| !target.contains(repo.id))
        .cloned()
        .collect();

    let to_archive = target
        .iter()
        .filter(|page| !source.contains(page.repo_id))
        .cloned()
        .collect();

    SyncPlan {
        to_create,
        to_archive,
    }
}
