pub mod bucket;
pub mod decorator;
pub mod genesis;
pub mod model;

pub use bucket::{principal_bucket, role_bucket, RoleBindingBucket, SIGNATURE_INDEX};
pub use decorator::{AuthNDecorator, AuthZDecorator};
pub use genesis::{from_genesis, GenesisRbac};
pub use model::{NamedSignature, Permission, Principal, Role, RoleBinding};

use podgate_engine::query::{IdEncoder, QueryRouter};

use bucket::{PRINCIPAL_BUCKET_NAME, ROLEBIND_BUCKET_NAME, ROLE_BUCKET_NAME};

/// Register RBAC query paths with the router.
pub fn register_query(qr: &mut QueryRouter) {
    qr.register_bucket("/rbac/roles", ROLE_BUCKET_NAME, IdEncoder::U64BigEndian);
    qr.register_bucket("/rbac/principals", PRINCIPAL_BUCKET_NAME, IdEncoder::U64BigEndian);
    qr.register_index(
        "/rbac/principals/signature",
        PRINCIPAL_BUCKET_NAME,
        SIGNATURE_INDEX,
        true,
        IdEncoder::U64BigEndian,
    );
    qr.register_bucket("/rbac/rolebindings", ROLEBIND_BUCKET_NAME, IdEncoder::Address);
}
