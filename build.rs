// Build script to compile the UI shaders from GLSL to SPIR-V

use std::path::Path;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=shaders/ui.vert");
    println!("cargo:rerun-if-changed=shaders/ui.frag");

    // Compile shaders using glslc (part of Vulkan SDK)
    compile_shader("shaders/ui.vert", "shaders/ui.vert.spv");
    compile_shader("shaders/ui.frag", "shaders/ui.frag.spv");
}

fn compile_shader(input: &str, output: &str) {
    let input_path = Path::new(input);
    let output_path = Path::new(output);

    let result = Command::new("glslc")
        .arg(input_path)
        .arg("-o")
        .arg(output_path)
        .status();

    match result {
        Ok(status) if status.success() => {}
        Ok(status) => {
            panic!("Failed to compile {}: exit code {:?}", input, status.code());
        }
        Err(e) => {
            // Not fatal: the renderer reads SPIR-V at runtime from config.toml paths
            println!("cargo:warning=glslc not found ({}), skipping {}", e, input);
            println!("cargo:warning=compile manually: glslc {} -o {}", input, output);
        }
    }
}
