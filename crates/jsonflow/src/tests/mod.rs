mod decode_good;
pub(crate) mod support;
