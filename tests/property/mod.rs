//! Property-based tests for derivation invariants
