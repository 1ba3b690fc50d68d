//! Operator registry operations.
//!
//! Every operation runs on behalf of an explicit [`CallerIdentity`]. Writes
//! only ever match documents owned by the caller, so a foreign operator and a
//! missing one produce the same not-found outcome.

use operator_repo_api::{ApiError, ApiResult};
use operator_repo_storage::{
    DynStorage, FindOptions, Operator, OperatorFilter, OperatorInput, OperatorPage,
    OperatorPatch, SortSpec,
};
use serde::Deserialize;
use tracing::{debug, info};
use utoipa::IntoParams;

use crate::config::RegistrySettings;
use crate::identity::CallerIdentity;

/// Query parameters of the list operation.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Regular expression matched against the operator name
    pub search: Option<String>,
    /// Maximum number of results; 0 or unset means no limit
    pub limit: Option<u64>,
    /// Number of results to skip
    pub offset: Option<u64>,
    /// Sort key as `field:asc|desc`, default `name:asc`
    pub sort: Option<String>,
}

impl ListQuery {
    fn search(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }

    fn sort_spec(&self) -> ApiResult<SortSpec> {
        match self.sort.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => Ok(raw.parse()?),
            None => Ok(SortSpec::default()),
        }
    }
}

#[derive(Clone)]
pub struct OperatorService {
    storage: DynStorage,
    settings: RegistrySettings,
}

impl OperatorService {
    pub fn new(storage: DynStorage, settings: RegistrySettings) -> Self {
        Self { storage, settings }
    }

    pub fn storage(&self) -> &DynStorage {
        &self.storage
    }

    /// Stores a new operator owned by the caller.
    pub async fn create(
        &self,
        caller: &CallerIdentity,
        input: OperatorInput,
    ) -> ApiResult<Operator> {
        let created = self.storage.insert(input.into_new(caller.as_str())).await?;
        info!(id = %created.id, owner = %created.user_id, "operator created");
        Ok(created)
    }

    /// Returns one page of operators visible to the caller plus the total
    /// number of matches.
    pub async fn list(&self, caller: &CallerIdentity, query: &ListQuery) -> ApiResult<OperatorPage> {
        let mut filter = OperatorFilter::new().visible_to(caller.as_str());
        // Pattern syntax is checked by the backend running the match
        if let Some(search) = query.search() {
            filter = filter.with_name_pattern(search);
        }

        let options = FindOptions::new()
            .with_sort(query.sort_spec()?)
            .with_skip(query.offset.unwrap_or(0))
            .with_limit(query.limit.unwrap_or(0));

        let (operators, total_count) = tokio::try_join!(
            self.storage.find(&filter, &options),
            self.storage.count(&filter)
        )?;
        debug!(
            caller = %caller,
            returned = operators.len(),
            total_count,
            "listed operators"
        );
        Ok(OperatorPage {
            operators,
            total_count,
        })
    }

    /// Reads one operator by id.
    ///
    /// Any caller may read any operator unless
    /// `registry.enforce_read_visibility` is set.
    pub async fn get(&self, caller: &CallerIdentity, id: &str) -> ApiResult<Operator> {
        let mut filter = OperatorFilter::by_id(id);
        if self.settings.enforce_read_visibility {
            filter = filter.visible_to(caller.as_str());
        }
        self.storage
            .find_one(&filter)
            .await?
            .ok_or_else(ApiError::operator_not_found)
    }

    /// Applies `patch` to an operator owned by the caller and returns the
    /// updated document.
    pub async fn update(
        &self,
        caller: &CallerIdentity,
        id: &str,
        patch: OperatorPatch,
    ) -> ApiResult<Operator> {
        let filter = OperatorFilter::by_id(id).with_owner(caller.as_str());
        let updated = self
            .storage
            .find_one_and_update(&filter, &patch)
            .await?
            .ok_or_else(ApiError::operator_not_found)?;
        debug!(id, caller = %caller, "operator updated");
        Ok(updated)
    }

    pub async fn delete(&self, caller: &CallerIdentity, id: &str) -> ApiResult<()> {
        let filter = OperatorFilter::by_id(id).with_owner(caller.as_str());
        if !self.storage.delete_one(&filter).await? {
            return Err(ApiError::operator_not_found());
        }
        debug!(id, caller = %caller, "operator deleted");
        Ok(())
    }

    /// Deletes all of `ids` or none of them.
    ///
    /// Every id must name an operator owned by the caller.
    pub async fn delete_many(&self, caller: &CallerIdentity, ids: Vec<String>) -> ApiResult<()> {
        let requested = ids.len() as u64;
        let filter = OperatorFilter::new()
            .with_ids(ids)
            .with_owner(caller.as_str());

        let matched = self.storage.count(&filter).await?;
        if matched != requested {
            debug!(requested, matched, caller = %caller, "batch delete rejected");
            return Err(ApiError::operator_not_found());
        }

        let deleted = self.storage.delete_many(&filter).await?;
        debug!(deleted, caller = %caller, "operators deleted");
        Ok(())
    }
}
