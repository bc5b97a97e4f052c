//! SeaORM entity models
//!
//! Database entities for CopyFlow

mod api_key;
mod bulk_job;
mod bulk_job_item;
mod generation;
mod rate_counter;
mod tenant;
mod usage_record;

pub use tenant::{
    Entity as TenantEntity,
    Model as Tenant,
    ActiveModel as TenantActiveModel,
    Column as TenantColumn,
    Plan,
};

pub use api_key::{
    Entity as ApiKeyEntity,
    Model as ApiKey,
    ActiveModel as ApiKeyActiveModel,
    Column as ApiKeyColumn,
};

pub use usage_record::{
    Entity as UsageRecordEntity,
    Model as UsageRecord,
    ActiveModel as UsageRecordActiveModel,
    Column as UsageRecordColumn,
};

pub use rate_counter::{
    Entity as RateCounterEntity,
    Model as RateCounter,
    ActiveModel as RateCounterActiveModel,
    Column as RateCounterColumn,
};

pub use bulk_job::{
    Entity as BulkJobEntity,
    Model as BulkJob,
    ActiveModel as BulkJobActiveModel,
    Column as BulkJobColumn,
    BulkInput,
    JobStatus,
};

pub use bulk_job_item::{
    Entity as BulkJobItemEntity,
    Model as BulkJobItem,
    ActiveModel as BulkJobItemActiveModel,
    Column as BulkJobItemColumn,
    ItemStatus,
};

pub use generation::{
    Entity as GenerationEntity,
    Model as Generation,
    ActiveModel as GenerationActiveModel,
    Column as GenerationColumn,
};
