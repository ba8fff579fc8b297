//! Fixed test IDs for deterministic tests

use common::types::SubjectId;
use uuid::Uuid;

// Subject IDs (100-199)
pub const TEST_SUBJECT_ALICE: SubjectId = SubjectId(Uuid::from_u128(100));
pub const TEST_SUBJECT_BOB: SubjectId = SubjectId(Uuid::from_u128(101));

// Subject that never exists in any store
pub const TEST_SUBJECT_GHOST: SubjectId = SubjectId(Uuid::from_u128(199));
