pub mod currency;
pub mod price;
pub mod trip;
