#![cfg(not(doctest))]

#[macro_use]
extern crate diesel;

pub mod cache;
pub mod db;
pub mod mfa;
pub mod models;
pub mod schema;
pub mod secretbox;
pub mod threadrand;
pub mod token;
pub mod totp;
pub mod validators;
