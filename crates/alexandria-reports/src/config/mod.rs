pub mod locator;
pub mod params;
pub mod report;
pub mod schema;

pub use locator::Locator;
pub use params::{ParamDef, Params};
pub use report::{FileNaming, ReportJob};
pub use schema::{BrowserConfig, Config, LoginConfig, OnFailure, Timeouts};
