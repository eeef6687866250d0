#![no_main]

use clrscope::{metadata::tables::MethodDef, MetadataImage};
use libfuzzer_sys::fuzz_target;

fn exercise(image: &MetadataImage) {
    for (index, method) in image.iter::<MethodDef>().enumerate() {
        let Ok(method) = method else { continue };
        let _ = method.signature(image);

        if let Ok(code) = image.disassemble(index as u32) {
            for _ in code.instructions() {}
        }
    }
}

fuzz_target!(|data: &[u8]| {
    if let Ok(image) = MetadataImage::from_mem(data.to_vec()) {
        exercise(&image);
    }

    if let Ok(image) = MetadataImage::from_metadata(data.to_vec()) {
        exercise(&image);
    }
});
