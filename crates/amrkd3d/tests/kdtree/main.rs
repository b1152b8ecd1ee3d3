mod octants;
mod rendering_order;
#[cfg(feature = "serde-serialize")]
mod serialization;
