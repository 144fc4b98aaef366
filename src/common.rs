pub mod db_utils;
pub mod error;

#[cfg(all(test, feature = "db-tests"))]
pub mod test_support;
