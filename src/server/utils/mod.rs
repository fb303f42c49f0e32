pub mod encoding_utils;
pub mod locator_utils;
