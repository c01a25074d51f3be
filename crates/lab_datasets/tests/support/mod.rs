#![allow(dead_code)]

use std::cell::RefCell;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use lab_datasets::catalog::DatasetEntry;
use lab_datasets::kaggle::DatasetSource;
use lab_datasets::DatasetError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const PAYSIM_SAMPLE: &str = "\
step,type,amount,nameOrig,oldbalanceOrg,newbalanceOrig,nameDest,oldbalanceDest,newbalanceDest,isFraud,isFlaggedFraud
1,PAYMENT,9839.64,C1231006815,170136.0,160296.36,M1979787155,0.0,0.0,0,0
1,TRANSFER,181.0,C1305486145,181.0,0.0,C553264065,0.0,0.0,1,0
1,CASH_OUT,181.0,C840083671,181.0,0.0,C38997010,21182.0,0.0,1,0
2,PAYMENT,11668.14,C2048537720,41554.0,29885.86,M1230701703,0.0,0.0,0,0
2,TRANSFER,215310.3,C553264065,705.0,0.0,C1305486145,22425.0,0.0,0,0
";

/// How a fake download behaves for one slug.
#[derive(Clone)]
pub enum Payload {
    Plain(&'static str),
    Zipped(&'static str),
    /// An archive that does not contain the catalog file.
    ZippedElsewhere(&'static str),
    /// Starts with the zip signature but is not a readable archive.
    CorruptZip,
    Fail,
}

/// In-memory stand-in for Kaggle that records the slugs it was asked for.
pub struct FakeSource {
    payloads: Vec<(&'static str, Payload)>,
    pub requested: RefCell<Vec<String>>,
}

impl FakeSource {
    pub fn new(payloads: Vec<(&'static str, Payload)>) -> Self {
        Self {
            payloads,
            requested: RefCell::new(Vec::new()),
        }
    }
}

impl DatasetSource for FakeSource {
    fn download(&self, entry: &DatasetEntry, destination: &Path) -> Result<u64, DatasetError> {
        self.requested.borrow_mut().push(entry.slug.to_string());
        let payload = self
            .payloads
            .iter()
            .find(|(slug, _)| *slug == entry.slug)
            .map(|(_, payload)| payload.clone())
            .unwrap_or(Payload::Fail);

        match payload {
            Payload::Plain(text) => fs::write(destination, text).expect("write payload"),
            Payload::Zipped(text) => write_zip(destination, entry.file_name, text),
            Payload::ZippedElsewhere(text) => write_zip(destination, "other.csv", text),
            Payload::CorruptZip => {
                fs::write(destination, b"PK\x03\x04truncated").expect("write payload")
            }
            Payload::Fail => {
                fs::write(destination, "partial").expect("write partial");
                return Err(DatasetError::Status {
                    slug: entry.slug.to_string(),
                    status: 403,
                });
            }
        }
        Ok(fs::metadata(destination).expect("payload metadata").len())
    }
}

pub fn write_zip(path: &Path, entry_name: &str, body: &str) {
    let mut zip = ZipWriter::new(File::create(path).expect("create zip"));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(entry_name, options).expect("start entry");
    zip.write_all(body.as_bytes()).expect("write entry");
    zip.finish().expect("finish zip");
}
