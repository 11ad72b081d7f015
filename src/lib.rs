// lib.rs
pub mod hidef;
pub mod nodeidx;
pub mod ontology;
pub mod refine;
pub mod stats;
pub mod termstats;
