// Entity Models
//
// Account is the only resource: stable integer identity assigned by the
// database, values that change through partial updates.

pub mod account;

pub use account::{Account, AccountUpdate, NewAccount};
