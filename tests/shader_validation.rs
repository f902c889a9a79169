//! WGSL 着色器离线校验（naga 解析 + 验证），并检查管线用到的入口点

use sph_toon::render::shader::{COMPOSITE_WGSL, PARTICLE_WGSL, SIMULATE_WGSL};

fn validate(name: &str, source: &str) -> naga::Module {
    let module = match naga::front::wgsl::parse_str(source) {
        Ok(module) => module,
        Err(e) => panic!("Failed to parse {}:\n{}", name, e.emit_to_string(source)),
    };

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    if let Err(e) = validator.validate(&module) {
        panic!("Failed to validate {}:\n{:?}", name, e);
    }
    module
}

fn entry_point<'a>(module: &'a naga::Module, name: &str) -> &'a naga::EntryPoint {
    module
        .entry_points
        .iter()
        .find(|ep| ep.name == name)
        .unwrap_or_else(|| panic!("missing entry point {}", name))
}

#[test]
fn test_simulate_shader() {
    let module = validate("simulate.wgsl", SIMULATE_WGSL);
    let main = entry_point(&module, "main");
    assert_eq!(main.stage, naga::ShaderStage::Compute);
    assert_eq!(main.workgroup_size, [256, 1, 1]);
}

#[test]
fn test_particle_shader() {
    let module = validate("particle.wgsl", PARTICLE_WGSL);
    assert_eq!(entry_point(&module, "vs_main").stage, naga::ShaderStage::Vertex);
    assert_eq!(entry_point(&module, "fs_depth").stage, naga::ShaderStage::Fragment);
    assert_eq!(entry_point(&module, "fs_main").stage, naga::ShaderStage::Fragment);
}

#[test]
fn test_composite_shader() {
    let module = validate("composite.wgsl", COMPOSITE_WGSL);
    assert_eq!(entry_point(&module, "vs_main").stage, naga::ShaderStage::Vertex);
    assert_eq!(entry_point(&module, "fs_main").stage, naga::ShaderStage::Fragment);
}

#[test]
fn test_workgroup_size_matches_dispatch_plan() {
    let module = validate("simulate.wgsl", SIMULATE_WGSL);
    assert_eq!(
        entry_point(&module, "main").workgroup_size[0],
        sph_toon::render::particles::WORKGROUP_SIZE
    );
}
