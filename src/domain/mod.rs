pub mod memes;
