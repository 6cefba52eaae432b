// src/common/fs_utils.rs

use std::fs;
use std::io::Write;
use std::path::Path;

use uuid::Uuid;

use crate::common::error::AppError;

// ---
// Escrita atômica: tmp + fsync + rename
// ---
/// Grava `bytes` em `path` sem nunca deixar um arquivo truncado no lugar.
/// O rename é atômico no mesmo diretório; o fsync do diretório é best-effort.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Caminho sem diretório pai: {}", path.display()))?;
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("collection");
    let tmp = parent.join(format!(".{}.tmp.{}", file_name, Uuid::new_v4().simple()));

    let written = (|| -> std::io::Result<()> {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    if let Ok(dir) = fs::File::open(parent) {
        let _ = dir.sync_all();
    }
    Ok(())
}

// ---
// Transliteração (mapa explícito, independente de locale)
// ---
pub fn transliterate(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'ç' => 'c',
            'Ç' => 'C',
            'ğ' => 'g',
            'Ğ' => 'G',
            'ı' => 'i',
            'İ' => 'I',
            'ö' => 'o',
            'Ö' => 'O',
            'ş' => 's',
            'Ş' => 'S',
            'ü' => 'u',
            'Ü' => 'U',
            'â' => 'a',
            'Â' => 'A',
            'î' => 'i',
            'Î' => 'I',
            'û' => 'u',
            'Û' => 'U',
            other => other,
        })
        .collect()
}

/// Normaliza texto para comparações "sem acento, sem caixa".
/// `to_lowercase` puro transforma 'İ' em "i̇", por isso transliteramos antes.
pub fn fold(input: &str) -> String {
    transliterate(input.trim()).to_ascii_lowercase()
}

const MAX_FILENAME_LEN: usize = 120;

/// Reduz um nome de arquivo ao subconjunto seguro `[A-Za-z0-9._-]`.
pub fn sanitize_filename(name: &str) -> String {
    let mut out: String = transliterate(name.trim())
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    // Sem nomes ocultos nem ".." vindos do cliente
    while out.starts_with('.') {
        out.remove(0);
    }
    if out.len() > MAX_FILENAME_LEN {
        // Preserva a extensão quando corta
        let ext = out.rsplit_once('.').map(|(_, e)| e.to_string());
        out.truncate(MAX_FILENAME_LEN);
        if let Some(ext) = ext.filter(|e| e.len() < 10) {
            out.truncate(MAX_FILENAME_LEN - ext.len() - 1);
            out.push('.');
            out.push_str(&ext);
        }
    }
    if out.is_empty() {
        out.push_str("arquivo");
    }
    out
}

/// Segmento de caminho vindo de fora (id do dono, nome armazenado).
pub fn ensure_safe_segment(segment: &str) -> Result<(), AppError> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.contains('\\')
        || segment.contains('\0')
    {
        return Err(AppError::validation(format!(
            "Segmento de caminho inválido: '{}'",
            segment
        )));
    }
    Ok(())
}
