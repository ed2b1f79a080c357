//! C++ source generation.
//!
//! The unit starts with every layout constant as a `#define` so the data
//! arrays and functions below can index by name. Function bodies only
//! reference those names, never raw offsets.

use std::fmt::{self, Write};

use crate::config::ExportConfig;
use crate::exporter::Harvest;
use crate::layout::Tables;

/// Display adapter rendering one generated unit.
pub struct GeneratedUnit<'a> {
    pub harvest: &'a Harvest,
    pub tables: &'a Tables,
    pub config: &'a ExportConfig,
}

impl fmt::Display for GeneratedUnit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "// Generated by shotpack. Do not edit.")?;
        writeln!(f, "#pragma once")?;
        writeln!(f)?;
        for (name, value) in self.tables.layout.defines() {
            writeln!(f, "#define {name} {value}")?;
        }
        writeln!(f)?;
        self.text_pool(f)?;
        self.float_data(f)?;
        self.int_data(f)?;
        self.programs(f)?;
        self.framebuffers(f)?;
        self.passes(f)?;
        shot_at_beats(f)?;
        f.write_str(EVAL_CURVE)
    }
}

impl GeneratedUnit<'_> {
    fn text_pool(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.harvest.text.as_slice();
        f.write_str("const char* gTextPool[] = {")?;
        if text.is_empty() {
            f.write_str("\"\"")?;
        }
        for (i, entry) in text.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str("\n\"")?;
            write_c_string(f, entry)?;
            f.write_str("\"")?;
        }
        f.write_str("};\n\n")
    }

    fn float_data(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.tables.floats.iter().map(float_literal).collect();
        write_array(f, "const float gFloatData[]", &values, "0.0f")
    }

    fn int_data(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self
            .tables
            .ints
            .as_slice()
            .iter()
            .map(|v| v.to_string())
            .collect();
        write_array(f, "const int gIntData[]", &values, "0")
    }

    fn programs(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = self.harvest.stitches.order();
        writeln!(f, "GLuint gPrograms[gProgramCount];")?;
        writeln!(f, "__forceinline void TickLoader(int, int);")?;
        writeln!(f, "__forceinline void initPrograms(int width, int height)\n{{")?;
        if !self.harvest.stitches.is_empty() {
            let stitches: Vec<String> = order.iter().map(|s| format!("gTextPool[{s}]")).collect();
            writeln!(
                f,
                "\tconst char* gShaderStitchOrder[] = {{{}}};",
                stitches.join(", ")
            )?;
            writeln!(f, "\tint i = 0;\n\tdo\n\t{{")?;
            if self.config.emit_debug_stitch_dump {
                f.write_str(DEBUG_STITCH_DUMP)?;
            }
            writeln!(
                f,
                "\t\tgPrograms[i] = glCreateShaderProgramv(GL_FRAGMENT_SHADER, gIntData[gProgramData + i * 2], &gShaderStitchOrder[gIntData[gProgramData + i * 2 + 1]]);"
            )?;
            writeln!(f, "\t\tTickLoader(width, height);")?;
            writeln!(f, "\t}}\n\twhile(++i < gProgramCount);")?;
        }
        writeln!(f, "}}\n")
    }

    fn framebuffers(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let has_buffers = !self.harvest.framebuffers.is_empty();
        if has_buffers {
            writeln!(f, "GLuint gTextures[gTextureCount];")?;
            writeln!(f, "GLuint gFrameBuffers[gFrameBufferCount + 1];")?;
            writeln!(f, "GLuint* gFrameBufferColorBuffers[gFrameBufferCount + 1];")?;
        }
        writeln!(
            f,
            "\n__forceinline void widthHeight(int i, int width, int height, int& w, int& h)\n{{"
        )?;
        if has_buffers {
            f.write_str(WIDTH_HEIGHT)?;
        }
        writeln!(f, "}}\n")?;
        writeln!(f, "__forceinline void initFrameBuffers(int width, int height)\n{{")?;
        if has_buffers {
            f.write_str(INIT_FRAME_BUFFERS)?;
        }
        writeln!(f, "}}\n")
    }

    fn passes(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(APPLY_UNIFORM)?;
        writeln!(
            f,
            "__forceinline bool bindPass(int passIndex, float seconds, float beats, int width, int height, bool isPrecalcStep)\n{{"
        )?;
        let has_buffers = !self.harvest.framebuffers.is_empty();
        if has_buffers {
            f.write_str(BIND_TARGET_CHECK)?;
        }
        f.write_str("\tint w = width;\n\tint h = height;\n")?;
        f.write_str("\tGLuint shader = gPrograms[gIntData[gPassProgramsAndTargets + passIndex * 2]];\n")?;
        f.write_str("\tglUseProgram(shader);\n")?;
        if has_buffers {
            f.write_str(BIND_TARGET)?;
        }
        f.write_str(BIND_BUILTINS)?;
        if has_buffers && self.tables.layout.max_pass_inputs > 0 {
            f.write_str(BIND_INPUTS)?;
        }
        if self.tables.layout.max_pass_uniforms > 0 {
            f.write_str(BIND_CONST_UNIFORMS)?;
        }
        f.write_str("\treturn true;\n}\n\n")
    }
}

fn shot_at_beats(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(
        "__forceinline int shotAtBeats(float beats, float& localBeats)\n{\n\
         \tint shotTimeCursor = 0;\n\
         \tdo\n\t{\n\
         \t\tif(beats < gFloatData[gShotTimes + shotTimeCursor * 2 + 1])\n\t\t{\n\
         \t\t\tlocalBeats = beats - gFloatData[gShotTimes + shotTimeCursor * 2];\n\
         \t\t\treturn shotTimeCursor;\n\
         \t\t}\n\
         \t}\n\twhile(++shotTimeCursor < gShotCount);\n\
         \treturn -1;\n}\n\n",
    )
}

fn write_array(
    f: &mut fmt::Formatter<'_>,
    decl: &str,
    values: &[String],
    empty: &str,
) -> fmt::Result {
    write!(f, "{decl} = {{")?;
    if values.is_empty() {
        f.write_str(empty)?;
    }
    for (i, chunk) in values.chunks(16).enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "\n\t{}", chunk.join(", "))?;
    }
    f.write_str("};\n\n")
}

/// C++ literal for a pooled float. `+inf` marks stepped tangents.
pub fn float_literal(value: f32) -> String {
    if value == f32::INFINITY {
        "FLT_MAX".to_string()
    } else if value == f32::NEG_INFINITY {
        "-FLT_MAX".to_string()
    } else {
        format!("{value:?}f")
    }
}

/// Escape `text` for a C string literal, continuing the literal across
/// source lines at every newline.
pub fn write_c_string(out: &mut impl Write, text: &str) -> fmt::Result {
    for c in text.chars() {
        match c {
            '\\' => out.write_str("\\\\")?,
            '"' => out.write_str("\\\"")?,
            '\n' => out.write_str("\\n\\\n")?,
            '\t' => out.write_str("\\t")?,
            '\r' => {}
            c if (c as u32) < 0x20 || c == '\x7f' => write!(out, "\\{:03o}", c as u32)?,
            c => out.write_char(c)?,
        }
    }
    Ok(())
}

const DEBUG_STITCH_DUMP: &str = "\t\t#ifdef _DEBUG
\t\tOutputDebugString(\"\\n\\n\\n--------------------------------\\n\\n\\n\");
\t\tfor (int j = 0; j < gIntData[gProgramData + i * 2]; ++j)
\t\t{
\t\t\tOutputDebugString(gShaderStitchOrder[gIntData[gProgramData + i * 2 + 1] + j]);
\t\t}
\t\tOutputDebugString(\"\\n\\n\\n--------------------------------\\n\\n\\n\");
\t\t#endif
";

const WIDTH_HEIGHT: &str = "\tw = gIntData[gFrameBufferData + i * gFrameBufferBlockSize + 1];
\th = gIntData[gFrameBufferData + i * gFrameBufferBlockSize + 2];
\tif(w == 0)
\t{
\t\tw = width;
\t\th = height;
\t}
\tw /= gIntData[gFrameBufferData + i * gFrameBufferBlockSize + 3];
\th /= gIntData[gFrameBufferData + i * gFrameBufferBlockSize + 3];
";

const INIT_FRAME_BUFFERS: &str = "\tgFrameBuffers[0] = 0;
\tglGenFramebuffers(gFrameBufferCount, &gFrameBuffers[1]);
\tglGenTextures(gTextureCount, gTextures);
\tint textureCursor = 0;
\tint i = 0;
\tdo
\t{
\t\tglBindFramebuffer(GL_FRAMEBUFFER, gFrameBuffers[i + 1]);
\t\tgFrameBufferColorBuffers[i] = &gTextures[textureCursor];
\t\tint j = 0;
\t\tdo
\t\t{
\t\t\tint w, h;
\t\t\twidthHeight(i, width, height, w, h);
\t\t\tif(gIntData[gFrameBufferData + i * gFrameBufferBlockSize + 6])
\t\t\t{
\t\t\t\tglBindTexture(GL_TEXTURE_3D, gTextures[textureCursor]);
\t\t\t\tglTexImage3D(GL_TEXTURE_3D, 0, GL_RGBA32F, w, w, w, 0, GL_RGBA, GL_FLOAT, NULL);
\t\t\t\tglTexParameteri(GL_TEXTURE_3D, GL_TEXTURE_MIN_FILTER, GL_LINEAR);
\t\t\t\tglTexParameteri(GL_TEXTURE_3D, GL_TEXTURE_MAG_FILTER, GL_LINEAR);
\t\t\t\tglFramebufferTexture(GL_FRAMEBUFFER, GL_COLOR_ATTACHMENT0 + j, gTextures[textureCursor++], 0);
\t\t\t\tcontinue;
\t\t\t}
\t\t\tglBindTexture(GL_TEXTURE_2D, gTextures[textureCursor]);
\t\t\tglTexImage2D(GL_TEXTURE_2D, 0, GL_RGBA32F, w, h, 0, GL_RGBA, GL_FLOAT, NULL);
\t\t\tglTexParameteri(GL_TEXTURE_2D, GL_TEXTURE_MIN_FILTER, GL_LINEAR);
\t\t\tglTexParameteri(GL_TEXTURE_2D, GL_TEXTURE_MAG_FILTER, GL_LINEAR);
\t\t\tif(gIntData[gFrameBufferData + i * gFrameBufferBlockSize + 4] == 0)
\t\t\t{
\t\t\t\tglTexParameteri(GL_TEXTURE_2D, GL_TEXTURE_WRAP_S, GL_CLAMP);
\t\t\t\tglTexParameteri(GL_TEXTURE_2D, GL_TEXTURE_WRAP_T, GL_CLAMP);
\t\t\t}
\t\t\tglFramebufferTexture2D(GL_FRAMEBUFFER, GL_COLOR_ATTACHMENT0 + j, GL_TEXTURE_2D, gTextures[textureCursor++], 0);
\t\t}
\t\twhile(++j < gIntData[gFrameBufferData + i * gFrameBufferBlockSize]);
\t}
\twhile(++i < gFrameBufferCount);
";

const APPLY_UNIFORM: &str = "__forceinline void applyUniform(int dataSize, GLint uniformLocation, const float* dataHandle)
{
\tswitch(dataSize)
\t{
\tcase 1:
\t\tglUniform1fv(uniformLocation, 1, dataHandle);
\t\tbreak;
\tcase 2:
\t\tglUniform2fv(uniformLocation, 1, dataHandle);
\t\tbreak;
\tcase 3:
\t\tglUniform3fv(uniformLocation, 1, dataHandle);
\t\tbreak;
\tdefault:
\t\tglUniform4fv(uniformLocation, 1, dataHandle);
\t\tbreak;
\t}
}

const GLenum gBufferBindings[] = {GL_COLOR_ATTACHMENT0, GL_COLOR_ATTACHMENT0 + 1, GL_COLOR_ATTACHMENT0 + 2, GL_COLOR_ATTACHMENT0 + 3, GL_COLOR_ATTACHMENT0 + 4, GL_COLOR_ATTACHMENT0 + 5, GL_COLOR_ATTACHMENT0 + 6, GL_COLOR_ATTACHMENT0 + 7};

";

const BIND_TARGET_CHECK: &str = "\tint frameBufferId = gIntData[gPassProgramsAndTargets + passIndex * 2 + 1] - 1;
\tif(frameBufferId < 0)
\t{
\t\tif(isPrecalcStep)
\t\t\treturn false;
\t}
\telse if(!isPrecalcStep && gIntData[gFrameBufferData + frameBufferId * gFrameBufferBlockSize + 5])
\t{
\t\treturn false;
\t}
";

const BIND_TARGET: &str = "\tglBindFramebuffer(GL_FRAMEBUFFER, gFrameBuffers[frameBufferId + 1]);
\tif(frameBufferId >= 0)
\t{
\t\tglDrawBuffers(gIntData[gFrameBufferData + frameBufferId * gFrameBufferBlockSize], gBufferBindings);
\t\twidthHeight(frameBufferId, width, height, w, h);
\t}
";

const BIND_BUILTINS: &str = "\tglViewport(0, 0, w, h);
\tglUniform2f(glGetUniformLocation(shader, \"uResolution\"), (float)w, (float)h);
\tglUniform1f(glGetUniformLocation(shader, \"uSeconds\"), seconds);
\tglUniform1f(glGetUniformLocation(shader, \"uBeats\"), beats);
";

const BIND_INPUTS: &str = "\tint inputRow = gPassInputs + passIndex * (gMaxPassInputs * 2 + 1);
\tint j2d = 0, j3d = 0;
\tfor(int j = 0; j < gIntData[inputRow]; ++j)
\t{
\t\tchar formatStr[] = \"uImages[00]\\0\\0\\0\";
\t\tint o = 7, b;
\t\tint is3d = gIntData[inputRow + 2 + j * 2];
\t\tglActiveTexture(GL_TEXTURE0 + j);
\t\tglBindTexture(is3d ? GL_TEXTURE_3D : GL_TEXTURE_2D, gTextures[gIntData[inputRow + 1 + j * 2]]);
\t\tif(is3d)
\t\t{
\t\t\tb = j3d++;
\t\t\tformatStr[o++] = '3';
\t\t\tformatStr[o++] = 'D';
\t\t}
\t\telse
\t\t\tb = j2d++;
\t\tformatStr[o++] = '[';
\t\tif(b >= 10)
\t\t\tformatStr[o++] = '0' + (b / 10);
\t\tformatStr[o++] = '0' + (b % 10);
\t\tformatStr[o++] = ']';
\t\tformatStr[o] = '\\0';
\t\tglUniform1i(glGetUniformLocation(shader, formatStr), j);
\t}
";

const BIND_CONST_UNIFORMS: &str = "\tint uniformRow = gPassConstUniforms + passIndex * (gMaxPassUniforms * 3 + 1);
\tfor(int j = 0; j < gIntData[uniformRow]; ++j)
\t{
\t\tGLint loc = glGetUniformLocation(shader, gTextPool[gIntData[uniformRow + 1 + j * 3]]);
\t\tconst float* ptr = &gFloatData[gIntData[uniformRow + 2 + j * 3]];
\t\tapplyUniform(gIntData[uniformRow + 3 + j * 3], loc, ptr);
\t}
";

/// Runtime evaluation of one exported key array (see `animation`).
const EVAL_CURVE: &str = "__forceinline float evalCurve(const float* data, int numFloats, float beats)
{
\tif(numFloats == 2 || beats <= data[0])
\t\treturn data[1];

\t// right key: first key later than beats, or the last key
\tint right = 3;
\twhile(right < numFloats - 3 && data[right + 1] <= beats)
\t\tright += 4;
\tif(beats >= data[right + 1])
\t\treturn data[right + 2];

\tfloat y0 = data[right - 2];
\tfloat m0 = data[right - 1];
\tif(m0 == FLT_MAX)
\t\treturn y0;
\tfloat m1 = data[right];
\tfloat y1 = data[right + 2];

\tfloat c0 = y0 + y0 - y1 - y1 + m0 + m1;
\tfloat c1 = (y1 - y0) * 3.0f - m0 - m0 - m1;
\tfloat c2 = m0;
\tfloat c3 = y0;

\tfloat t = (beats - data[right - 3]) / (data[right + 1] - data[right - 3]);
\treturn t * (t * (t * c0 + c1) + c2) + c3;
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_strings_continue_across_lines() {
        let mut out = String::new();
        write_c_string(&mut out, "a\t\"b\"\\\r\nc\u{1}").expect("string write");
        assert_eq!(out, "a\\t\\\"b\\\"\\\\\\n\\\nc\\001");
    }

    #[test]
    fn float_literals() {
        assert_eq!(float_literal(1.0), "1.0f");
        assert_eq!(float_literal(-0.25), "-0.25f");
        assert_eq!(float_literal(f32::INFINITY), "FLT_MAX");
    }
}
