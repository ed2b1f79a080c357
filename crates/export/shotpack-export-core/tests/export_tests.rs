use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use shotpack_curve_core::{Curve, ExtremumPivot};
use shotpack_export_core::{
    key_array, BlobHeader, ErrorCategory, ExportConfig, ExportError, Exporter, InputBinding,
    Project,
};
use shotpack_pool_core::round_mantissa;
use shotpack_test_fixtures::projects;
use tempfile::TempDir;

fn approx(a: f64, b: f64, eps: f64) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn demo() -> (Project, PathBuf) {
    let path = projects::path("demo").expect("demo fixture");
    let root = projects::root("demo").expect("demo root");
    (Project::load(&path).expect("demo parses"), root)
}

/// Same algorithm as the generated `evalCurve`, on an exported key array.
fn eval_exported(data: &[f32], beats: f32) -> f32 {
    let n = data.len();
    if n == 2 || beats <= data[0] {
        return data[1];
    }
    let mut right = 3;
    while right < n - 3 && data[right + 1] <= beats {
        right += 4;
    }
    if beats >= data[right + 1] {
        return data[right + 2];
    }
    let (y0, m0, m1, y1) = (data[right - 2], data[right - 1], data[right], data[right + 2]);
    if m0 == f32::INFINITY {
        return y0;
    }
    let c0 = 2.0 * y0 - 2.0 * y1 + m0 + m1;
    let c1 = 3.0 * (y1 - y0) - 2.0 * m0 - m1;
    let t = (beats - data[right - 3]) / (data[right + 1] - data[right - 3]);
    t * (t * (t * c0 + c1) + m0) + y0
}

/// Minimal on-disk project for failure cases.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let sandbox = Self {
            dir: TempDir::new().expect("temp dir"),
        };
        sandbox.file("templates/t/common.glsl", "uniform float uBeats;\n");
        sandbox.file("scenes/s/main.glsl", "void main(){}\n");
        sandbox
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn file(&self, rel: &str, text: &str) {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, text).expect("write");
    }

    fn export(&self, project: serde_json::Value) -> Result<shotpack_export_core::Artifact, ExportError> {
        self.export_with(project, ExportConfig::default())
    }

    fn export_with(
        &self,
        project: serde_json::Value,
        config: ExportConfig,
    ) -> Result<shotpack_export_core::Artifact, ExportError> {
        let project: Project = serde_json::from_value(project).expect("project json");
        Exporter::new(&project, self.root(), config).run()
    }
}

fn pass(extra: serde_json::Value) -> serde_json::Value {
    let mut pass = json!({
        "sections": [{ "kind": "shared", "path": "common.glsl" }, { "path": "main.glsl" }]
    });
    if let (Some(obj), Some(extra)) = (pass.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            obj.insert(k.clone(), v.clone());
        }
    }
    pass
}

fn project_with(passes: Vec<serde_json::Value>, shots: serde_json::Value) -> serde_json::Value {
    json!({
        "templates": { "t": { "passes": passes } },
        "scenes": [{ "name": "s", "template": "t", "shots": shots }]
    })
}

fn one_shot(channels: serde_json::Value) -> serde_json::Value {
    json!([{ "name": "a", "start": 0, "end": 4, "channels": channels }])
}

/// it should flatten the demo project into the expected tables
#[test]
fn demo_export_counts() {
    let (project, root) = demo();
    let artifact = Exporter::new(&project, &root, ExportConfig::default())
        .with_blob(true)
        .run()
        .expect("demo exports");
    let s = &artifact.summary;
    assert_eq!((s.shots, s.scenes, s.passes, s.programs), (3, 2, 4, 4));
    assert_eq!(s.framebuffers, 2);
    assert_eq!(s.layout.texture_count, 3);
    assert_eq!(s.layout.max_pass_inputs, 2);
    assert_eq!(s.layout.max_pass_uniforms, 1);
    assert_eq!(s.layout.anim_entries_max, 2);
    assert_eq!(s.layout.frame_buffer_block_size, 7);

    assert!(artifact.source.contains("#define gShotCount 3\n"));
    assert!(artifact.source.contains("#define gProgramCount 4\n"));
    assert!(artifact.source.contains("FLT_MAX"));
    assert!(artifact.source.contains("__forceinline float evalCurve("));
    assert!(artifact.source.contains("__forceinline bool bindPass("));
    let first_define = artifact.source.find("#define").expect("defines");
    let first_array = artifact.source.find("gTextPool[] =").expect("text pool");
    assert!(first_define < first_array);

    let blob = artifact.blob.as_deref().expect("blob requested");
    let header = BlobHeader::parse(blob).expect("blob header");
    assert_eq!(header.version, 1);
    assert_eq!(header.shot_count, 3);
    assert_eq!(header.fbo_count, 2);
    assert_eq!(s.blob_bytes, Some(blob.len()));
}

/// it should export every project listed in the fixture manifest
#[test]
fn every_fixture_project_exports() {
    let names = projects::keys();
    assert!(names.iter().any(|n| n == "demo"));
    for name in names {
        let project: Project = projects::load(&name).expect("fixture parses");
        let root = projects::root(&name).expect("fixture root");
        let artifact = Exporter::new(&project, &root, ExportConfig::default())
            .run()
            .unwrap_or_else(|err| panic!("fixture {name} failed to export: {err}"));
        assert!(artifact.summary.shots > 0, "{name}");
        assert!(artifact.source.contains("#pragma once"), "{name}");
    }
}

/// it should produce byte-identical output for identical input
#[test]
fn export_is_deterministic() {
    let (project, root) = demo();
    let run = || {
        Exporter::new(&project, &root, ExportConfig::default())
            .with_blob(true)
            .run()
            .expect("demo exports")
    };
    let a = run();
    let b = run();
    assert_eq!(a.source, b.source);
    assert_eq!(a.blob, b.blob);
    assert_eq!(a.summary, b.summary);
}

/// it should share passes between scenes and flatten colour buffers
#[test]
fn demo_passes_and_scenes() {
    let (project, root) = demo();
    let harvest = Exporter::new(&project, &root, ExportConfig::default())
        .harvest()
        .expect("demo harvests");
    assert_eq!(harvest.scenes[0].passes, vec![0, 1, 2]);
    assert_eq!(harvest.scenes[1].passes, vec![3, 1, 2]);
    assert_eq!(
        harvest.passes[1].inputs,
        vec![InputBinding { texture: 1, is3d: false }]
    );
    let present: Vec<u32> = harvest.passes[2].inputs.iter().map(|i| i.texture).collect();
    assert_eq!(present, vec![0, 2]);
    assert_eq!(harvest.passes[2].target(), 0);
    assert_eq!(harvest.passes[0].target(), 1);
    assert_eq!(harvest.passes[1].target(), 2);

    let scenes: Vec<usize> = harvest.shots.iter().map(|s| s.scene).collect();
    assert_eq!(scenes, vec![0, 0, 1]);
    // uFade is shared by name across shots
    assert_eq!(harvest.shots[0].uniforms[0].name, harvest.shots[2].uniforms[0].name);
    assert_eq!(harvest.text.get(harvest.shots[0].uniforms[1].name as usize), Some("uOrigin"));
    assert_eq!(harvest.shots[0].uniforms[1].channels.len(), 2);
}

/// it should lay tables out so the player's indexing reaches every entry
#[test]
fn layout_offsets_resolve() {
    let (project, root) = demo();
    let exporter = Exporter::new(&project, &root, ExportConfig::default());
    let harvest = exporter.harvest().expect("demo harvests");
    let tables = shotpack_export_core::layout::build(&harvest, exporter.config());
    let ints = tables.ints.as_slice();
    let floats = tables.floats.to_vec();
    let layout = &tables.layout;

    let times = &floats[layout.shot_times as usize..layout.shot_times as usize + 6];
    assert_eq!(times, &[0.0, 4.0, 4.0, 8.0, 8.0, 12.0]);

    // index exactly as the player's evalDemo does
    let at = |i: i32| -> i32 { *ints.get(i as usize).expect("index inside gIntData") };
    for (shot, record) in harvest.shots.iter().enumerate() {
        let shot = shot as i32;
        let anim_offset = at(shot * 2 + layout.shot_animation_data_ids);
        let anim_entries = at(shot * 2 + layout.shot_animation_data_ids + 1);
        let scene = at(shot + layout.shot_scene);

        let pass_count = at(scene + layout.scene_pass_ids);
        let passes: Vec<u32> = (0..pass_count)
            .map(|cursor| at(scene + cursor + layout.scene_pass_ids + 1) as u32)
            .collect();
        assert_eq!(passes, harvest.scenes[record.scene].passes);

        assert_eq!(anim_entries as usize, record.uniforms.len());
        for (u, uniform) in record.uniforms.iter().enumerate() {
            let idx = anim_offset + u as i32 * 10 + layout.shot_uniform_data;
            assert_eq!(at(idx) as u32, uniform.name);
            assert_eq!(at(idx + 1) as usize, uniform.channels.len());
            for (c, keys) in uniform.channels.iter().enumerate() {
                let offset = at(idx + 2 + c as i32 * 2) as usize;
                let len = at(idx + 3 + c as i32 * 2) as usize;
                assert_eq!(&floats[offset..offset + len], keys.as_slice());
            }
        }
    }
    // stored entries are relative to their table base
    assert_eq!(at(layout.shot_scene), 0);
    assert_eq!(at(2 + layout.shot_scene), 4);
    assert_eq!(at(2 + layout.shot_animation_data_ids), 20);
    assert_eq!(at(4 + layout.shot_animation_data_ids), 30);

    let fbo = layout.frame_buffer_data as usize;
    assert_eq!(&ints[fbo..fbo + 7], &[2, 0, 0, 1, 0, 0, 0]);
    assert_eq!(&ints[fbo + 7..fbo + 14], &[1, 0, 0, 2, 0, 0, 0]);

    // inputs: [count, (texture, is3d) x maxInputs] per pass
    let stride = 2 * layout.max_pass_inputs as usize + 1;
    let present = layout.pass_inputs as usize + 2 * stride;
    assert_eq!(&ints[present..present + stride], &[2, 0, 0, 2, 0]);

    // constant uniform uTint on the intro scene pass
    let uniforms = layout.pass_const_uniforms as usize;
    assert_eq!(ints[uniforms], 1);
    let (offset, size) = (ints[uniforms + 2] as usize, ints[uniforms + 3] as usize);
    assert_eq!(&floats[offset..offset + size], &[1.0, 0.5, 0.25]);
}

/// it should export key arrays the runtime evaluates like the curve engine
#[test]
fn exported_curves_match_engine() {
    let (project, _) = demo();
    let open = &project.scenes[0].shots[0];
    let mut shot = open.to_shot("intro", ExtremumPivot::Zero).expect("shot parses");
    shot.bake().expect("bakes");
    for (name, curve) in &shot.curves {
        let keys = key_array(curve).expect("finite");
        assert_eq!(keys.len(), curve.len() * 4 - 2, "{name}");
        for step in 0..=50 {
            let t = -0.5f32 + step as f32 * 0.1;
            approx(
                f64::from(eval_exported(&keys, t)),
                curve.evaluate(f64::from(t)),
                1e-4,
            );
        }
    }

    let mut single = Curve::new();
    single.insert_key_at(3.0, 7.0);
    let keys = key_array(&single).expect("finite");
    assert_eq!(eval_exported(&keys, 0.0), 7.0);
    assert_eq!(eval_exported(&keys, 10.0), 7.0);
}

/// it should keep comments only when minification is off
#[test]
fn minify_toggle() {
    let (project, root) = demo();
    let minified = Exporter::new(&project, &root, ExportConfig::default())
        .run()
        .expect("demo exports");
    assert!(!minified.source.contains("shared by every pass"));
    let raw = Exporter::new(
        &project,
        &root,
        ExportConfig {
            minify_shaders: false,
            ..ExportConfig::default()
        },
    )
    .run()
    .expect("demo exports");
    assert!(raw.source.contains("shared by every pass"));
    assert!(raw.summary.text_bytes > minified.summary.text_bytes);
}

/// it should round every pooled float when precision is reduced
#[test]
fn reduced_precision_rounds_floats() {
    let (project, root) = demo();
    let config = ExportConfig {
        float_mantissa_bits: 16,
        ..ExportConfig::default()
    };
    let exporter = Exporter::new(&project, &root, config);
    let harvest = exporter.harvest().expect("demo harvests");
    let tables = shotpack_export_core::layout::build(&harvest, exporter.config());
    assert_eq!(tables.floats.precision(), 16);
    for v in tables.floats.iter() {
        assert_eq!(v.to_bits(), round_mantissa(v, 16).to_bits());
    }

    let bad = ExportConfig {
        float_mantissa_bits: 4,
        ..ExportConfig::default()
    };
    let err = Exporter::new(&project, &root, bad).run().unwrap_err();
    assert!(matches!(err, ExportError::Config { .. }));
}

/// it should replace destinations only after staging every file
#[test]
fn artifact_write_is_atomic() {
    let (project, root) = demo();
    let artifact = Exporter::new(&project, &root, ExportConfig::default())
        .with_blob(true)
        .run()
        .expect("demo exports");
    let out = TempDir::new().expect("temp dir");
    let header = out.path().join("demo.hpp");
    let blob = out.path().join("demo.bin");
    fs::write(&header, "stale").expect("seed");
    artifact.write(&header, Some(&blob)).expect("writes");
    assert_eq!(fs::read_to_string(&header).expect("header"), artifact.source);
    assert_eq!(fs::read(&blob).ok(), artifact.blob);

    fs::write(&header, "stale").expect("reseed");
    let missing = out.path().join("missing").join("demo.bin");
    let err = artifact.write(&header, Some(&missing)).unwrap_err();
    assert!(matches!(err, ExportError::Write { .. }));
    assert_eq!(err.category(), ErrorCategory::Io);
    assert_eq!(fs::read_to_string(&header).expect("header"), "stale");
}

/// it should reject every unsupported or inconsistent project
#[test]
fn fatal_project_errors() {
    let sb = Sandbox::new();
    let fade = json!({ "uFade": "0,0,0,0,0,0,0,2,0,0,4,1,0,0,0,2" });

    let missing = project_with(
        vec![json!({ "sections": [{ "path": "nope.glsl" }] })],
        one_shot(fade.clone()),
    );
    assert!(matches!(sb.export(missing), Err(ExportError::MissingShader { .. })));

    let empty = project_with(vec![json!({ "sections": [] })], one_shot(fade.clone()));
    assert!(matches!(sb.export(empty), Err(ExportError::EmptyPass { .. })));

    let conflicting = project_with(
        vec![
            pass(json!({ "buffer": 3, "outputs": 1 })),
            pass(json!({ "buffer": 3, "outputs": 2 })),
        ],
        one_shot(fade.clone()),
    );
    assert!(matches!(
        sb.export(conflicting),
        Err(ExportError::ConflictingFramebuffer { key: 3, .. })
    ));

    let oversized = project_with(
        vec![pass(json!({ "buffer": 0, "size": 70000 }))],
        one_shot(fade.clone()),
    );
    assert!(matches!(sb.export(oversized), Err(ExportError::InvalidFramebuffer { .. })));

    let unknown_input = project_with(
        vec![pass(json!({ "inputs": [{ "buffer": 9 }] }))],
        one_shot(fade.clone()),
    );
    assert!(matches!(
        sb.export(unknown_input),
        Err(ExportError::UnknownInputBuffer { buffer: 9, .. })
    ));

    let bad_output = project_with(
        vec![
            pass(json!({ "buffer": 0, "outputs": 2 })),
            pass(json!({ "inputs": [{ "buffer": 0, "output": 2 }] })),
        ],
        one_shot(fade.clone()),
    );
    assert!(matches!(
        sb.export(bad_output),
        Err(ExportError::InvalidColorBuffer { output: 2, outputs: 2, .. })
    ));

    let gap = project_with(
        vec![pass(json!({}))],
        json!([
            { "name": "a", "start": 0, "end": 2 },
            { "name": "b", "start": 3, "end": 4 }
        ]),
    );
    assert!(matches!(sb.export(gap), Err(ExportError::TimelineGap { .. })));

    let unknown_template = json!({
        "templates": {},
        "scenes": [{ "name": "s", "template": "t", "shots": one_shot(json!({})) }]
    });
    assert!(matches!(
        sb.export(unknown_template),
        Err(ExportError::UnknownTemplate { .. })
    ));

    let malformed = project_with(vec![pass(json!({}))], one_shot(json!({ "uFoo.q": "" })));
    assert!(matches!(sb.export(malformed), Err(ExportError::Curve { .. })));

    let missing_component = project_with(
        vec![pass(json!({}))],
        one_shot(json!({ "uFoo.x": "", "uFoo.z": "" })),
    );
    assert!(matches!(sb.export(missing_component), Err(ExportError::Curve { .. })));
}

/// it should name editor-only features as unsupported
#[test]
fn unsupported_features() {
    let sb = Sandbox::new();
    sb.file("scenes/s/main.vert", "void main(){}\n");
    let shots = one_shot(json!({}));
    let cases = vec![
        project_with(
            vec![json!({
                "sections": [{ "kind": "shared", "path": "common.glsl", "uniforms": { "uX": 1.0 } }]
            })],
            shots.clone(),
        ),
        project_with(
            vec![pass(json!({ "inputs": [{ "texture": "noise.png" }] }))],
            shots.clone(),
        ),
        project_with(vec![json!({ "sections": [{ "path": "main.vert" }] })], shots.clone()),
        project_with(
            vec![json!({ "sections": [{ "path": "main.glsl", "uniforms": { "uTex": { "texture": 2 } } }] })],
            shots.clone(),
        ),
        project_with(
            vec![pass(json!({}))],
            json!([{ "name": "a", "start": 0, "end": 4, "textures": { "uNoise": "noise.png" } }]),
        ),
    ];
    for project in cases {
        let err = sb.export(project).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Unsupported, "{err}");
    }
}

/// it should tolerate overlaps only when configured to
#[test]
fn overlap_policy() {
    let sb = Sandbox::new();
    let overlapping = project_with(
        vec![pass(json!({}))],
        json!([
            { "name": "a", "start": 0, "end": 3 },
            { "name": "b", "start": 2, "end": 4 }
        ]),
    );
    assert!(matches!(
        sb.export(overlapping.clone()),
        Err(ExportError::TimelineOverlap { .. })
    ));
    let artifact = sb
        .export_with(
            overlapping,
            ExportConfig {
                allow_overlapping_shots: true,
                ..ExportConfig::default()
            },
        )
        .expect("overlap tolerated");
    assert_eq!(artifact.summary.shots, 2);
}

/// it should export an unanimated single-pass project
#[test]
fn minimal_project() {
    let sb = Sandbox::new();
    let artifact = sb
        .export(project_with(vec![pass(json!({}))], one_shot(json!({}))))
        .expect("exports");
    assert_eq!(artifact.summary.framebuffers, 0);
    assert_eq!(artifact.summary.layout.anim_entries_max, 0);
    assert!(!artifact.source.contains("gTextures["));
    assert!(artifact.source.contains("#define gShotCount 1\n"));
}
