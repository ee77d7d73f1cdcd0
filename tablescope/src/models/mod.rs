mod column;
mod filter;
mod foreign_key;
mod pagination;
mod primary_key;
mod record;
mod results;
mod value;

pub use column::*;
pub use filter::*;
pub use foreign_key::*;
pub use pagination::*;
pub use primary_key::*;
pub use record::*;
pub use results::*;
pub use value::*;
