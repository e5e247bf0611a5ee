//! # Events Module
//!
//! Event-driven progress reporting for the publish scheduler.
//!
//! ## Design
//! The core library emits events through channels, allowing any front end
//! (CLI spinner, JSON log, dashboard) to subscribe without the scheduler
//! knowing about it.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = event_channel();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Candidate(CandidateEvent::Published { external_id, .. }) = event {
//!             println!("published {external_id}");
//!         }
//!     }
//! });
//!
//! scheduler.run(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{event_channel, null_sender, EventReceiver, EventSender};
pub use types::*;
