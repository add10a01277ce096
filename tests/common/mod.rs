#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sales_lens::dataset::RawTable;
use tempfile::{TempDir, tempdir};

/// Product sheet in canonical units (tons, 10k yuan). P1 spans two rows.
pub const PRODUCT_SHEET: &str = "\
产品名称,数量,毛利,金额,成本,海运费
P1,4,1,10,6,1
P1,6,1,12,7,1
P2,20,8,40,25,2
P3,5,-1,9,8,1
";

/// The product sheet above expressed in kilograms and yuan.
pub const PRODUCT_SHEET_RAW_UNITS: &str = "\
产品名称,数量,毛利,金额,成本,海运费
P1,4000,10000,100000,60000,10000
P1,6000,10000,120000,70000,10000
P2,20000,80000,400000,250000,20000
P3,5000,-10000,90000,80000,10000
";

/// Five customers whose amounts rank c2, c5, c3, c4, c1.
pub const CUSTOMER_SHEET: &str = "\
Customer Name,Sales Amount,Gross Profit
c1,20,2
c2,100,12
c3,60,-3
c4,40,5
c5,80,9
";

/// Every customer has the same cost rate of 0.5.
pub const FLAT_COST_SHEET: &str = "\
客户名称,金额,毛利,成本
A,10,1,5
B,10,2,5
C,10,3,5
";

/// Product codes that parse as numbers but must stay distinct.
pub const NUMERIC_CODE_SHEET: &str = "\
产品名称,数量,毛利,金额,成本
007,1,1,10,6
7,2,1,10,6
1.23456,3,1,10,6
1.23459,4,1,10,6
$12,5,1,10,6
12,6,1,10,6
007,1,1,10,6
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Parses an in-memory CSV sheet the same way the loader does.
pub fn table_from_csv(contents: &str) -> RawTable {
    let mut lines = contents.lines().filter(|line| !line.trim().is_empty());
    let headers = lines
        .next()
        .expect("header line")
        .split(',')
        .map(str::to_string)
        .collect::<Vec<_>>();
    let records = lines
        .map(|line| line.split(',').map(str::to_string).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    RawTable::from_records(&headers, &records)
}
