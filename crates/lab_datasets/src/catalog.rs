//! The datasets the lab evaluates, in download order.

use serde::Serialize;

use crate::error::DatasetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetEntry {
    /// Kaggle `owner/dataset` slug.
    pub slug: &'static str,
    /// File fetched from the dataset and profiled afterwards.
    pub file_name: &'static str,
    /// Columns the file is expected to carry. Informational only.
    pub expected_columns: &'static [&'static str],
}

pub const CATALOG: [DatasetEntry; 5] = [
    DatasetEntry {
        slug: "ealaxi/paysim1",
        file_name: "PS_20174392719_1491204439457_log.csv",
        expected_columns: &[
            "step",
            "type",
            "amount",
            "nameOrig",
            "oldbalanceOrg",
            "newbalanceOrig",
            "nameDest",
            "oldbalanceDest",
            "newbalanceDest",
            "isFraud",
        ],
    },
    DatasetEntry {
        slug: "valakhorasani/bank-transaction-dataset-for-fraud-detection",
        file_name: "bank_transactions.csv",
        expected_columns: &[
            "TransactionID",
            "CustomerID",
            "TransactionDate",
            "Amount",
            "TransactionType",
            "FraudFlag",
        ],
    },
    DatasetEntry {
        slug: "sriharshaeedala/financial-fraud-detection-dataset",
        file_name: "financial_fraud_dataset.csv",
        expected_columns: &[
            "Unnamed: 0",
            "cc_num",
            "category",
            "amt",
            "gender",
            "street",
            "lat",
            "long",
            "city_pop",
            "job",
            "dob",
            "trans_num",
            "unix_time",
            "merch_lat",
            "merch_long",
            "is_fraud",
        ],
    },
    DatasetEntry {
        slug: "mlg-ulb/creditcardfraud",
        file_name: "creditcard.csv",
        expected_columns: &[
            "Time", "V1", "V2", "V3", "V4", "V5", "V6", "V7", "V8", "V9", "V10", "V11", "V12",
            "V13", "V14", "V15", "V16", "V17", "V18", "V19", "V20", "V21", "V22", "V23", "V24",
            "V25", "V26", "V27", "V28", "Amount", "Class",
        ],
    },
    DatasetEntry {
        slug: "feedzai/bank-account-fraud",
        file_name: "baf_train.csv",
        expected_columns: &[
            "accountID",
            "label",
            "date",
            "transactionID",
            "amount",
            "transactionType",
        ],
    },
];

pub fn find(slug: &str) -> Option<&'static DatasetEntry> {
    CATALOG.iter().find(|entry| entry.slug == slug)
}

/// Entries to process: the whole catalog when `only` is empty, otherwise the
/// named slugs in catalog order.
pub fn select(only: &[String]) -> Result<Vec<&'static DatasetEntry>, DatasetError> {
    if let Some(unknown) = only.iter().find(|slug| find(slug).is_none()) {
        return Err(DatasetError::UnknownDataset(unknown.clone()));
    }
    Ok(CATALOG
        .iter()
        .filter(|entry| only.is_empty() || only.iter().any(|slug| slug == entry.slug))
        .collect())
}
