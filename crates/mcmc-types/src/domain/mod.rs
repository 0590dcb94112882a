mod chain;
mod run;
mod sequence;

pub use chain::Chain;
pub use run::Run;
pub use sequence::{Sequence, SequenceKey};
