pub mod sensor_parser;
pub mod site_parser;

pub use sensor_parser::parse_sensor_page;
pub use site_parser::parse_site_list;
