//! # Repository Module
//!
//! Database repository implementations for BatiFlow.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Caller                                                                 │
//! │       │                                                                 │
//! │       │  db.documents().get_by_number("DEV-2026-10-0001")               │
//! │       ▼                                                                 │
//! │  DocumentRepository                                                     │
//! │  ├── create_draft / insert / save / delete                              │
//! │  ├── get_by_id / get_by_number                                          │
//! │  ├── list_by_type / list_by_source_quote                                │
//! │  └── update_status / mark_sent / sign                                   │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`DocumentRepository`](document::DocumentRepository) - Quote and invoice storage
//! - [`SequenceRepository`](sequence::SequenceRepository) - Persistent numbering

pub mod document;
pub mod sequence;
