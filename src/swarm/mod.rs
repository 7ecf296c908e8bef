pub mod history;
pub mod message;
pub mod possession;

pub use history::RoundHistory;
pub use message::{AgentId, Download, PeerView, PieceIndex, Request, Upload};
pub use possession::PossessionVector;
