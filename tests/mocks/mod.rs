#![allow(dead_code)]

pub mod fetcher;
pub mod generator;
pub mod titles;
