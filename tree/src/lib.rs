pub mod map;
pub mod multiset;
pub mod red_black_tree;
pub mod set;

pub use map::{KeyNotFound, Map};
pub use multiset::MultiSet;
pub use red_black_tree::{Cursor, RedBlackTree};
pub use set::Set;
