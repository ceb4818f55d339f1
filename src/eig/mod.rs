pub mod chain;
pub mod message;
pub mod node;
pub mod path;
pub mod peers;
pub mod process;
pub mod tree;
pub mod value;

pub use chain::*;
pub use message::*;
pub use node::*;
pub use path::*;
pub use peers::*;
pub use process::*;
pub use tree::*;
pub use value::*;
