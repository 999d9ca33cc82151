use crate::gemini::types::{Schema, Type};

pub const QUALITY_GOOD: &str = "good";
pub const QUALITY_POOR: &str = "poor";

/// Normalized box coordinates use the 0..=1000 grid Gemini reports in.
const BOX_MAX: f64 = 1000.0;

/// Output schema sent as `generationConfig.responseSchema` for identification calls.
///
/// ```json
/// { "quality": "good" | "poor", "qualityIssue"?: string,
///   "identifications": [{ "type", "confidence", "data": { "name", "code"?, "description",
///     "applications", "packages", "boundingBox": { "yMin", "xMin", "yMax", "xMax" } } }] }
/// ```
pub fn identification_schema() -> Schema {
    let bounding_box = Schema::object(
        [
            ("yMin", coordinate()),
            ("xMin", coordinate()),
            ("yMax", coordinate()),
            ("xMax", coordinate()),
        ],
        &["yMin", "xMin", "yMax", "xMax"],
    )
    .describe("Normalized bounding box of the item in the image");

    let data = Schema::object(
        [
            ("name", Schema::of(Type::String).describe("Common name of the item")),
            (
                "code",
                Schema::of(Type::String)
                    .nullable()
                    .describe("Part or model code if legible"),
            ),
            ("description", Schema::of(Type::String)),
            (
                "applications",
                Schema::array(Schema::of(Type::String)).describe("Typical applications"),
            ),
            (
                "packages",
                Schema::array(Schema::of(Type::String))
                    .describe("Known packages or model variants"),
            ),
            ("boundingBox", bounding_box),
        ],
        &["name", "description", "applications", "packages", "boundingBox"],
    );

    let identification = Schema::object(
        [
            ("type", Schema::of(Type::String).describe("Category tag of the item")),
            (
                "confidence",
                Schema::of(Type::Number).range(0.0, 1.0),
            ),
            ("data", data),
        ],
        &["type", "confidence", "data"],
    );

    Schema::object(
        [
            ("quality", Schema::enumerated([QUALITY_GOOD, QUALITY_POOR])),
            (
                "qualityIssue",
                Schema::of(Type::String)
                    .nullable()
                    .describe("Why the image is not usable, when quality is poor"),
            ),
            ("identifications", Schema::array(identification)),
        ],
        &["quality", "identifications"],
    )
}

fn coordinate() -> Schema {
    Schema::of(Type::Number).range(0.0, BOX_MAX)
}
