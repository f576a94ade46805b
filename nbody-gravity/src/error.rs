// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Error types for force evaluation and integration

use thiserror::Error;

/// Errors reported by solvers, integrators and the simulation driver
///
/// Invalid constructor arguments (negative softening, zero timestep, ...)
/// are programmer errors and panic instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GravityError {
    /// An active index does not address a particle in the store
    #[error("particle index {index} is out of range for a store of {len} particles")]
    IndexOutOfRange {
        /// The offending index
        index: usize,
        /// Number of particles in the store
        len: usize,
    },

    /// The same index was listed more than once in an active set
    #[error("particle index {index} appears more than once in the active set")]
    DuplicateIndex {
        /// The repeated index
        index: usize,
    },

    /// A particle with a NaN or infinite position was handed to the octree
    #[error("particle {index} has a non-finite position")]
    NonFinitePosition {
        /// Index of the particle
        index: usize,
    },

    /// A configuration value failed validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The dedicated worker pool could not be created
    #[error("failed to build worker thread pool: {0}")]
    ThreadPool(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, GravityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GravityError::IndexOutOfRange { index: 7, len: 3 };
        assert_eq!(
            err.to_string(),
            "particle index 7 is out of range for a store of 3 particles"
        );

        let err = GravityError::InvalidConfig("timestep must be non-zero".to_string());
        assert!(err.to_string().contains("timestep must be non-zero"));
    }
}
