//! Background decode stage: the two bounded queues and the worker threads between them.

pub(crate) mod queue;
pub(crate) mod worker;
