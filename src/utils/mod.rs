pub mod keyed_mutex;
pub mod object_url;
