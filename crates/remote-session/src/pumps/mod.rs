//! Background tasks that drive transport channels.

pub(crate) mod channel;
