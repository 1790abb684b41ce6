pub mod javascript;
