pub mod genesis;
pub mod handler;
pub mod model;

pub use genesis::{from_genesis, GenesisArtifact};
pub use handler::{register_routes, CreateArtifactHandler, DeleteArtifactHandler};
pub use model::{bucket, Artifact, BUCKET_NAME, CHECKSUM_INDEX};

use podgate_engine::query::{IdEncoder, QueryRouter};

/// Register artifact query paths with the router.
pub fn register_query(qr: &mut QueryRouter) {
    qr.register_bucket("/artifacts", BUCKET_NAME, IdEncoder::Raw);
    qr.register_index("/artifacts/checksum", BUCKET_NAME, CHECKSUM_INDEX, false, IdEncoder::Raw);
}
