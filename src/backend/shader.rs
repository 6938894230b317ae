// Shader bytecode loading
//
// Vulkan consumes SPIR-V as 4-byte words. The bytecode is compiled ahead of
// time (see build.rs) and read from disk at startup; the words are kept so
// the pipeline can be rebuilt on every swapchain recreation.

use std::fs::File;
use std::path::Path;

use super::pipeline::ShaderSet;
use crate::error::{RenderError, RenderResult};

/// Read a SPIR-V file into aligned words
pub fn load_spirv(path: &Path) -> RenderResult<Vec<u32>> {
    let shader_error = |source| RenderError::Shader {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(shader_error)?;
    // read_spv rejects partial words and fixes byte order
    ash::util::read_spv(&mut file).map_err(shader_error)
}

impl ShaderSet {
    pub fn load(vertex: &Path, fragment: &Path) -> RenderResult<Self> {
        let set = Self {
            vertex: load_spirv(vertex)?,
            fragment: load_spirv(fragment)?,
        };
        log::info!(
            "Loaded shaders {:?} ({} words), {:?} ({} words)",
            vertex,
            set.vertex.len(),
            fragment,
            set.fragment.len()
        );
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("iro-{}-{}", std::process::id(), name));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn reads_words() {
        let mut bytes = SPIRV_MAGIC.to_le_bytes().to_vec();
        bytes.extend_from_slice(&42u32.to_le_bytes());
        let path = temp_file("ok.spv", &bytes);

        let words = load_spirv(&path).unwrap();
        assert_eq!(words, vec![SPIRV_MAGIC, 42]);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn rejects_truncated_bytecode() {
        let mut bytes = SPIRV_MAGIC.to_le_bytes().to_vec();
        bytes.push(0);
        let path = temp_file("truncated.spv", &bytes);

        assert!(matches!(load_spirv(&path), Err(RenderError::Shader { .. })));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_file_names_the_path() {
        let path = Path::new("definitely/not/here.spv");
        let err = ShaderSet::load(path, path).unwrap_err();
        assert!(err.to_string().contains("here.spv"));
    }
}
