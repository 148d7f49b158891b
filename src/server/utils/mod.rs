pub mod fetch_utils;
pub mod m3u_utils;
