use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub dataset_uri: String,
    pub label: String,
    /// Home (source) environment
    pub environment_uri: String,
    /// Group owning the dataset in the source environment
    pub admin_group: String,
    pub aws_account_id: String,
    pub region: String,
    pub glue_database_name: String,
    pub s3_bucket_name: String,
    pub kms_alias: Option<String>,
}

/// A catalog table registered under a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetTable {
    pub table_uri: String,
    pub dataset_uri: String,
    pub glue_database_name: String,
    pub glue_table_name: String,
    pub s3_prefix: String,
}

/// An object-storage prefix (folder) registered under a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStorageLocation {
    pub location_uri: String,
    pub dataset_uri: String,
    pub label: String,
    pub s3_prefix: String,
}
