mod common;
mod scanning;
