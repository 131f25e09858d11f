pub mod token_dumper;

pub use token_dumper::TokenDumper;
