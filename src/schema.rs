//! The built-in configuration schema for the tile proxy.
//!
//! Pure declaration: this module owns no validation logic, it only spells
//! out the expected shape of a proxy configuration through the builder DSL.
//! Sections mirror the config file top to bottom — `globals`, `grids`,
//! `caches`, `services`, `sources`, `layers`.

use once_cell::sync::Lazy;

use crate::spec::{MalformedSpec, MappingSpec, Spec, SpecBuilder, SpecId};

static CONFIG_SPEC: Lazy<Spec> = Lazy::new(|| {
    build_config_spec().expect("built-in tile proxy schema is well-formed")
});

/// The process-lifetime schema every `check` run validates against.
pub fn config_spec() -> &'static Spec {
    &CONFIG_SPEC
}

struct Shared {
    string: SpecId,
    integer: SpecId,
    number: SpecId,
    boolean: SpecId,
    any: SpecId,
    string_list: SpecId,
    integer_list: SpecId,
    number_list: SpecId,
    /// `"-180,-90,180,90"` or `[-180, -90, 180, 90]`
    bbox: SpecId,
    coverage: SpecId,
    image_opts: SpecId,
    http_opts: SpecId,
    scale_hints: SpecId,
    /// host mapserver binary and working directory
    mapserver_opts: SpecId,
}

fn shared(b: &mut SpecBuilder) -> Result<Shared, MalformedSpec> {
    let string = b.string();
    let integer = b.integer();
    let number = b.number();
    let boolean = b.boolean();
    let any = b.any();
    let string_list = b.list(string);
    let integer_list = b.list(integer);
    let number_list = b.list(number);
    let bbox = b.one_of([string, number_list])?;

    let coverage = b.mapping(MappingSpec::new()
        .field("polygons", string)
        .field("polygons_srs", string)
        .field("bbox", bbox)
        .field("bbox_srs", string)
        .field("ogr_datasource", string)
        .field("ogr_where", string)
        .field("ogr_srs", string));

    let encoding_options = b.mapping(MappingSpec::new().wildcard(any));
    let image_opts = b.mapping(MappingSpec::new()
        .field("mode", string)
        .field("colors", number)
        .field("transparent", boolean)
        .field("resampling_method", string)
        .field("format", string)
        .field("encoding_options", encoding_options));

    let http_opts = b.mapping(MappingSpec::new()
        .field("method", string)
        .field("timeout", number)
        .field("ssl_no_cert_checks", boolean));

    let scale_hints = b.mapping(MappingSpec::new()
        .field("max_scale", number)
        .field("min_scale", number)
        .field("max_res", number)
        .field("min_res", number));

    let mapserver_opts = b.mapping(MappingSpec::new()
        .field("binary", string)
        .field("working_dir", string));

    Ok(Shared {
        string,
        integer,
        number,
        boolean,
        any,
        string_list,
        integer_list,
        number_list,
        bbox,
        coverage,
        image_opts,
        http_opts,
        scale_hints,
        mapserver_opts,
    })
}

fn globals_section(b: &mut SpecBuilder, s: &Shared) -> SpecId {
    let formats = b.mapping(MappingSpec::new().wildcard(s.image_opts));
    let image = b.mapping(MappingSpec::new()
        .field("resampling_method", s.string)
        .field("paletted", s.boolean)
        .field("stretch_factor", s.number)
        .field("max_shrink_factor", s.number)
        .field("jpeg_quality", s.number)
        .field("formats", formats));
    let http = b.mapping(MappingSpec::new().field("timeout", s.number));
    let cache = b.mapping(MappingSpec::new()
        .field("base_dir", s.string)
        .field("lock_dir", s.string)
        .field("meta_size", s.number_list)
        .field("meta_buffer", s.number)
        .field("minimize_meta_requests", s.boolean)
        .field("concurrent_tile_creators", s.integer));
    let grid = b.mapping(MappingSpec::new().field("tile_size", s.integer_list));
    let srs = b.mapping(MappingSpec::new()
        .field("axis_order_ne", s.string_list)
        .field("axis_order_en", s.string_list)
        .field("proj_data_dir", s.string));
    b.mapping(MappingSpec::new()
        .field("image", image)
        .field("http", http)
        .field("cache", cache)
        .field("grid", grid)
        .field("srs", srs)
        .field("mapserver", s.mapserver_opts))
}

fn grids_section(b: &mut SpecBuilder, s: &Shared) -> Result<SpecId, MalformedSpec> {
    let res_factor = b.one_of([s.number, s.string])?;
    let grid = b.mapping(MappingSpec::new()
        .field("base", s.string)
        .field("name", s.string)
        .field("srs", s.string)
        .field("bbox", s.bbox)
        .field("bbox_srs", s.string)
        .field("num_levels", s.integer)
        .field("res", s.number_list)
        .field("res_factor", res_factor)
        .field("max_res", s.number)
        .field("min_res", s.number)
        .field("stretch_factor", s.number)
        .field("max_shrink_factor", s.number)
        .field("align_resolutions_with", s.string)
        .field("origin", s.string)
        .field("tile_size", s.integer_list)
        .field("threshold_res", s.number_list));
    Ok(b.mapping(MappingSpec::new().wildcard(grid)))
}

fn caches_section(b: &mut SpecBuilder, s: &Shared) -> SpecId {
    let watermark = b.mapping(MappingSpec::new()
        .field("text", s.string)
        .field("font_size", s.number)
        .field("opacity", s.number)
        .field("spacing", s.string));
    let cache = b.mapping(MappingSpec::new()
        .required("sources", s.string_list)
        .field("name", s.string)
        .field("grids", s.string_list)
        .field("cache_dir", s.string)
        .field("meta_size", s.number_list)
        .field("meta_buffer", s.number)
        .field("minimize_meta_requests", s.boolean)
        .field("concurrent_tile_creators", s.integer)
        .field("disable_storage", s.boolean)
        .field("format", s.string)
        .field("image", s.image_opts)
        .field("request_format", s.string)
        .field("use_direct_from_level", s.number)
        .field("use_direct_from_res", s.number)
        .field("link_single_color_images", s.boolean)
        .field("watermark", watermark));
    b.mapping(MappingSpec::new().wildcard(cache))
}

fn services_section(b: &mut SpecBuilder, s: &Shared) -> SpecId {
    let empty = b.mapping(MappingSpec::new());
    let attribution = b.mapping(MappingSpec::new().field("text", s.string));
    let featureinfo_xslt = b.mapping(MappingSpec::new().wildcard(s.string));
    let md = b.mapping(MappingSpec::new()
        .field("title", s.string)
        .field("abstract", s.string)
        .field("online_resource", s.string)
        .field("contact", s.any)
        .field("fees", s.string)
        .field("access_constraints", s.string));
    let wms = b.mapping(MappingSpec::new()
        .field("srs", s.string_list)
        .field("image_formats", s.string_list)
        .field("attribution", attribution)
        .field("featureinfo_types", s.string_list)
        .field("featureinfo_xslt", featureinfo_xslt)
        .field("source_errors", s.string)
        .field("md", md));
    b.mapping(MappingSpec::new()
        .field("demo", empty)
        .field("kml", empty)
        .field("tms", empty)
        .field("wmts", empty)
        .field("wms", wms))
}

fn sources_section(b: &mut SpecBuilder, s: &Shared) -> Result<SpecId, MalformedSpec> {
    // scale hints plus the knobs every source kind shares
    let commons_extra = b.mapping(MappingSpec::new()
        .field("concurrent_requests", s.integer)
        .field("coverage", s.coverage)
        .field("seed_only", s.boolean));
    let commons = b.merged([s.scale_hints, commons_extra])?;

    let transparent_color = b.one_of([s.string, s.number_list])?;
    let source_image_extra = b.mapping(MappingSpec::new()
        .field("opacity", s.number)
        .field("transparent_color", transparent_color)
        .field("transparent_color_tolerance", s.number));
    let source_image = b.merged([s.image_opts, source_image_extra])?;

    let wms_opts = b.mapping(MappingSpec::new()
        .field("version", s.string)
        .field("map", s.boolean)
        .field("featureinfo", s.boolean)
        .field("legendgraphic", s.boolean)
        .field("legendurl", s.string)
        .field("featureinfo_format", s.string)
        .field("featureinfo_xslt", s.string));
    // req carries the upstream request template; anything beyond url is
    // passed through verbatim
    let req = b.mapping(MappingSpec::new()
        .required("url", s.string)
        .wildcard(s.any));
    let wms_fields = b.mapping(MappingSpec::new()
        .field("wms_opts", wms_opts)
        .field("image", source_image)
        .field("supported_formats", s.string_list)
        .field("supported_srs", s.string_list)
        .field("http", s.http_opts)
        .required("req", req));
    let wms = b.merged([commons, wms_fields])?;

    // a host mapserver binary speaks WMS too, but its request block is
    // free-form and the binary location can override the global default
    let mapserver_wms_opts = b.mapping(MappingSpec::new()
        .field("version", s.string)
        .field("map", s.boolean)
        .field("featureinfo", s.boolean)
        .field("legendgraphic", s.boolean)
        .field("legendurl", s.string));
    let mapserver_req = b.mapping(MappingSpec::new().wildcard(s.any));
    let mapserver_fields = b.mapping(MappingSpec::new()
        .field("wms_opts", mapserver_wms_opts)
        .field("image", source_image)
        .field("req", mapserver_req)
        .field("mapserver", s.mapserver_opts));
    let mapserver = b.merged([commons, mapserver_fields])?;

    let tile_fields = b.mapping(MappingSpec::new()
        .required("url", s.string)
        .field("transparent", s.boolean)
        .field("grid", s.string)
        .field("request_format", s.string)
        .field("origin", s.string)
        .field("http", s.http_opts));
    let tile = b.merged([commons, tile_fields])?;

    let mapnik_fields = b.mapping(MappingSpec::new()
        .required("mapfile", s.string)
        .field("transparent", s.boolean));
    let mapnik = b.merged([commons, mapnik_fields])?;

    let debug = b.mapping(MappingSpec::new());

    let source = b.discriminated(
        "type",
        [
            ("wms", wms),
            ("mapserver", mapserver),
            ("tile", tile),
            ("mapnik", mapnik),
            ("debug", debug),
        ],
    )?;
    Ok(b.mapping(MappingSpec::new().wildcard(source)))
}

fn layers_section(b: &mut SpecBuilder, s: &Shared) -> Result<SpecId, MalformedSpec> {
    // list form first: layers nest arbitrarily deep through `layers`, and
    // listing it first keeps closest-alternative reports pointed at it
    let scale_hints = s.scale_hints;
    let string = s.string;
    let string_list = s.string_list;
    let layer_list = b.recursive(move |b, me| {
        let fields = b.mapping(MappingSpec::new()
            .field("sources", string_list)
            .field("name", string)
            .required("title", string)
            .field("legendurl", string)
            .field("layers", me));
        let layer = b.merged([scale_hints, fields])?;
        Ok(b.list(layer))
    })?;

    // legacy keyed form: layer name as mapping key
    let keyed_extra = b.mapping(MappingSpec::new()
        .field("sources", s.string_list)
        .required("title", s.string)
        .field("legendurl", s.string));
    let keyed_layer = b.merged([s.scale_hints, keyed_extra])?;
    let keyed_layers = b.mapping(MappingSpec::new().wildcard(keyed_layer));

    b.one_of([layer_list, keyed_layers])
}

fn build_config_spec() -> Result<Spec, MalformedSpec> {
    let mut b = SpecBuilder::new();
    let s = shared(&mut b)?;

    let globals = globals_section(&mut b, &s);
    let grids = grids_section(&mut b, &s)?;
    let caches = caches_section(&mut b, &s);
    let services = services_section(&mut b, &s);
    let sources = sources_section(&mut b, &s)?;
    let layers = layers_section(&mut b, &s)?;

    let root = b.mapping(MappingSpec::new()
        .field("globals", globals)
        .field("grids", grids)
        .field("caches", caches)
        .field("services", services)
        .field("sources", sources)
        .field("layers", layers));
    b.finish(root)
}
