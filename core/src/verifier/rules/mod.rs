//! Verifier Rules
//!
//! Each file in this module contains one rule:
//!
//! - `only_while.rs` - `for`, `for-in` and `do-while` must be gone
//! - `no_switch.rs` - `switch` must be gone
//! - `no_logical.rs` - `&&` and `||` must be gone
//! - `single_function.rs` - the program is one function expression statement

mod no_logical;
mod no_switch;
mod only_while;
mod single_function;

pub use no_logical::NoLogicalOperatorsRule;
pub use no_switch::NoSwitchRule;
pub use only_while::OnlyWhileLoopsRule;
pub use single_function::SingleFunctionProgramRule;
