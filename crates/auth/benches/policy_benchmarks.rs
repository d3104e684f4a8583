use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use menugate_auth::{
    Action, CrudFlags, ResourceGrant, ResourceNode, authorize, build_permission_tree, build_resource_tree,
    merge_permissions,
};
use menugate_core::{ResourceId, RoleId};
use uuid::Uuid;

/// A balanced menu: `sections` roots, each with `per_section` leaves.
fn menu(sections: usize, per_section: usize) -> Vec<ResourceNode> {
    let mut nodes = Vec::with_capacity(sections * (per_section + 1));
    let mut next = 1u128;
    for s in 0..sections {
        let root_id = ResourceId::from_uuid(Uuid::from_u128(next));
        next += 1;
        nodes.push(ResourceNode::new(format!("section-{s}"), format!("/s{s}")).with_id(root_id).with_order(s as i32));
        for l in 0..per_section {
            nodes.push(
                ResourceNode::new(format!("page-{s}-{l}"), format!("/s{s}/p{l}"))
                    .with_id(ResourceId::from_uuid(Uuid::from_u128(next)))
                    .with_parent(root_id)
                    .with_order(l as i32),
            );
            next += 1;
        }
    }
    nodes
}

/// Every resource granted by each of `roles` roles, with alternating flags.
fn grants(nodes: &[ResourceNode], roles: usize) -> Vec<ResourceGrant> {
    let mut out = Vec::with_capacity(nodes.len() * roles);
    for r in 0..roles {
        let role_id = RoleId::from_uuid(Uuid::from_u128(10_000 + r as u128));
        for (i, node) in nodes.iter().enumerate() {
            let flags = CrudFlags::new((i + r) % 4 == 0, true, (i + r) % 3 == 0, (i + r) % 5 == 0);
            out.push(ResourceGrant {
                role_id,
                resource: node.clone(),
                flags,
            });
        }
    }
    out
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_permissions");
    let nodes = menu(20, 10);

    for roles in [1usize, 3, 10] {
        let records = grants(&nodes, roles);
        group.throughput(Throughput::Elements(records.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(roles), &records, |b, records| {
            b.iter(|| black_box(merge_permissions(black_box(records))));
        });
    }

    group.finish();
}

fn bench_tree_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_build");

    for sections in [10usize, 50, 200] {
        let nodes = menu(sections, 10);
        group.throughput(Throughput::Elements(nodes.len() as u64));
        group.bench_with_input(BenchmarkId::new("resource_tree", sections), &nodes, |b, nodes| {
            b.iter(|| black_box(build_resource_tree(black_box(nodes))));
        });

        let merged = merge_permissions(&grants(&nodes, 2));
        group.bench_with_input(BenchmarkId::new("permission_tree", sections), &merged, |b, merged| {
            b.iter(|| black_box(build_permission_tree(black_box(merged))));
        });
    }

    group.finish();
}

fn bench_authorize(c: &mut Criterion) {
    let nodes = menu(50, 10);
    let tree = build_permission_tree(&merge_permissions(&grants(&nodes, 3)));

    let mut group = c.benchmark_group("authorize");
    group.bench_function("first_section", |b| {
        b.iter(|| black_box(authorize(&tree, black_box("section-0"), Action::Read)));
    });
    group.bench_function("last_leaf", |b| {
        b.iter(|| black_box(authorize(&tree, black_box("page-49-9"), Action::Update)));
    });
    group.bench_function("unknown_resource", |b| {
        b.iter(|| black_box(authorize(&tree, black_box("missing"), Action::Read)));
    });
    group.finish();
}

criterion_group!(benches, bench_merge, bench_tree_build, bench_authorize);
criterion_main!(benches);
