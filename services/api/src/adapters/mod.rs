pub mod db;
pub mod parser;
pub mod storage;

pub use db::DbAdapter;
pub use parser::HttpParsingGateway;
pub use storage::HttpObjectStorage;
