use std::{env, error::Error, fs};

// Must match `WORKGROUP_SIZE` and `SHAPE_VERTEX_COUNT` in src/shader_utils.rs, the
// naga tests in that module check it.
const WORKGROUP_SIZE: u32 = 64;
const SHAPE_VERTEX_COUNT: u32 = 3;

// All shaders reside in the 'src/shaders' directory. Files ending in ".inc" are only
// pulled in through `{% include %}` and are not written out on their own.
fn generate_shaders() -> std::result::Result<(), Box<dyn Error>> {
    let tera = tera::Tera::new("src/shaders/*")?;
    println!("cargo:rerun-if-changed=src/shaders/");
    let mut context = tera::Context::new();
    context.insert("workgroup_size", &WORKGROUP_SIZE);
    context.insert("shape_vertex_count", &SHAPE_VERTEX_COUNT);
    let output_path = env::var("OUT_DIR")?;
    fs::create_dir_all(format!("{}/shaders/", output_path))?;
    for file in fs::read_dir("src/shaders")? {
        let path = file?.path();
        println!("cargo:rerun-if-changed={}", path.display());
        if path.extension().and_then(|e| e.to_str()) != Some("wgsl") {
            continue;
        }
        let file_name = match path.file_name().and_then(|f| f.to_str()) {
            Some(name) => name.to_owned(),
            None => continue,
        };
        let result = tera.render(&file_name, &context)?;
        fs::write(format!("{}/shaders/{}", output_path, file_name), result)?;
    }
    Ok(())
}

fn main() {
    if let Err(err) = generate_shaders() {
        // panic here for a nicer error message, otherwise it will
        // be flattened to one line for some reason
        panic!("Unable to generate shaders\n{}", err);
    }
}
