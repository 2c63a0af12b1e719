#![forbid(unsafe_code)]

pub mod check;
pub mod encoding;
pub mod hash;
mod load;

#[cfg(test)]
mod test;
