//! Compilation performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scssc::*;
use std::fs;
use tempfile::TempDir;

const THEME: &str = r#"
$primary: #336699;
$gutter: 8px;

@mixin button($color: $primary) {
    padding: $gutter ($gutter * 2);
    background: $color;
    &:hover { background: lighten($color, 10%); }
    @content;
}

%panel { border: 1px solid darken($primary, 20%); }

.card {
    @extend %panel;
    margin: $gutter / 2;
    .title { font: { weight: bold; size: 14px; } }
    @media (max-width: 600px) { margin: 0; }
}

@each $name, $color in (save green, cancel red, info $primary) {
    .btn-#{$name} { @include button($color) { border-radius: 2px; } }
}
"#;

fn bench_simple_compilation(c: &mut Criterion) {
    let source = ".a { color: red; .b { margin: 0; } }";
    c.bench_function("simple_compilation", |b| {
        b.iter(|| compile_source(black_box(source), "simple.scss").unwrap())
    });
}

fn bench_theme_compilation(c: &mut Criterion) {
    c.bench_function("theme_compilation", |b| {
        b.iter(|| compile_source(black_box(THEME), "theme.scss").unwrap())
    });
}

fn bench_large_file_compilation(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let input_path = temp_dir.path().join("large.scss");
    let output_path = temp_dir.path().join("large.css");

    let mut content = String::from("%base { display: block; }\n");
    for i in 0..1000 {
        content.push_str(&format!(".item-{} {{ @extend %base; width: {}px; .label {{ top: {}px; }} }}\n", i, i, i % 10));
    }
    fs::write(&input_path, content).unwrap();

    c.bench_function("large_file_compilation", |b| {
        b.iter(|| {
            compile_file(
                black_box(input_path.to_str().unwrap()),
                black_box(output_path.to_str().unwrap()),
            )
            .unwrap()
        })
    });
}

fn bench_url_modes(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let theme_dir = temp_dir.path().join("theme");
    fs::create_dir(&theme_dir).unwrap();
    fs::write(theme_dir.join("_icons.scss"), ".icon { background: url(img/icon.png) no-repeat; }").unwrap();
    let input_path = temp_dir.path().join("main.scss");
    fs::write(&input_path, "@import \"theme/icons\";").unwrap();
    let source = fs::read_to_string(&input_path).unwrap();

    let mut group = c.benchmark_group("url_modes");
    for mode in [UrlMode::Absolute, UrlMode::Relative, UrlMode::Mixed] {
        let options = CompilerOptions {
            url_mode: mode,
            ..Default::default()
        };
        group.bench_function(mode.to_string(), |b| {
            b.iter(|| {
                compile_source_with_options(black_box(&source), input_path.to_str().unwrap(), options.clone()).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_simple_compilation,
    bench_theme_compilation,
    bench_large_file_compilation,
    bench_url_modes
);
criterion_main!(benches);
