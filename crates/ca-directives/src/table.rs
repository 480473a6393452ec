use crate::ParameterSpec;

const OPEN_MODES: &[&str] = &["append", "truncate"];
const GRES_FLAGS: &[&str] = &["disable-binding", "enforce-binding"];

/// Every `#SBATCH` option accepted in job scripts.
///
/// Options without `maps_to` are accepted but never forwarded to the resource manager.
pub static SBATCH_PARAMETERS: &[ParameterSpec] = &[
    ParameterSpec::string("account").short('A').maps_to("account"),
    ParameterSpec::string("acctg-freq").maps_to("account_gather_frequency"),
    ParameterSpec::string("array").short('a').maps_to("array"),
    ParameterSpec::string("batch").maps_to("batch_features"),
    ParameterSpec::string("bb").maps_to("burst_buffer"),
    ParameterSpec::string("bbf"),
    ParameterSpec::string("begin").short('b').maps_to("begin_time"),
    ParameterSpec::string("chdir").short('D').maps_to("current_working_directory"),
    ParameterSpec::string("cluster-constraint").maps_to("cluster_constraints"),
    ParameterSpec::string("comment").maps_to("comment"),
    ParameterSpec::string("constraint").short('C').maps_to("constraints"),
    ParameterSpec::flag("contiguous").maps_to("contiguous"),
    ParameterSpec::string("core-spec").short('S').maps_to("core_specification"),
    ParameterSpec::string("cores-per-socket").maps_to("cores_per_socket"),
    ParameterSpec::string("cpu-freq").maps_to("cpu_frequency"),
    ParameterSpec::string("cpus-per-gpu").maps_to("cpus_per_gpu"),
    ParameterSpec::string("cpus-per-task").short('c').maps_to("cpus_per_task"),
    ParameterSpec::string("deadline").maps_to("deadline"),
    ParameterSpec::string("delay-boot").maps_to("delay_boot"),
    ParameterSpec::string("dependency").short('d').maps_to("dependency"),
    ParameterSpec::string("distribution").short('m').maps_to("distribution"),
    ParameterSpec::string("error").short('e').maps_to("standard_error"),
    ParameterSpec::string("exclude").short('x').maps_to("excluded_nodes"),
    ParameterSpec::optional("exclusive", "exclusive").maps_to("exclusive"),
    ParameterSpec::string("export"),
    ParameterSpec::string("export-file"),
    ParameterSpec::optional("get-user-env", "get-user-env"),
    ParameterSpec::string("gid").maps_to("group_id"),
    ParameterSpec::string("gpu-bind").maps_to("gpu_binding"),
    ParameterSpec::string("gpu-freq").maps_to("gpu_frequency"),
    ParameterSpec::string("gpus").short('G').maps_to("gpus"),
    ParameterSpec::string("gpus-per-node").maps_to("gpus_per_node"),
    ParameterSpec::string("gpus-per-socket").maps_to("gpus_per_socket"),
    ParameterSpec::string("gpus-per-task").maps_to("gpus_per_task"),
    ParameterSpec::string("gres").maps_to("gres"),
    ParameterSpec::choice("gres-flags", GRES_FLAGS).maps_to("gres_flags"),
    ParameterSpec::string("hint").maps_to("hint"),
    ParameterSpec::flag("hold").short('H').maps_to("hold"),
    ParameterSpec::flag("ignore-pbs"),
    ParameterSpec::string("input").short('i').maps_to("standard_input"),
    ParameterSpec::string("job-name").short('J').maps_to("name"),
    ParameterSpec::yes_no("kill-on-invalid-dep").maps_to("kill_on_invalid_dependency"),
    ParameterSpec::string("licenses").short('L').maps_to("licenses"),
    ParameterSpec::string("mail-type").maps_to("mail_type"),
    ParameterSpec::string("mail-user").maps_to("mail_user"),
    ParameterSpec::string("mcs-label").maps_to("mcs_label"),
    ParameterSpec::string("mem").maps_to("memory_per_node"),
    ParameterSpec::string("mem-bind").maps_to("memory_binding"),
    ParameterSpec::string("mem-per-cpu").maps_to("memory_per_cpu"),
    ParameterSpec::string("mem-per-gpu").maps_to("memory_per_gpu"),
    ParameterSpec::string("mincpus").maps_to("minimum_cpus_per_node"),
    ParameterSpec::string("network").maps_to("network"),
    ParameterSpec::string("nice").maps_to("nice"),
    ParameterSpec::negated("no-kill").short('k').maps_to("kill_on_node_fail"),
    ParameterSpec::flag("no-requeue"),
    ParameterSpec::string("nodefile").short('F'),
    ParameterSpec::string("nodelist").short('w').maps_to("nodes_list"),
    ParameterSpec::string("nodes").short('N').maps_to("nodes"),
    ParameterSpec::string("ntasks").short('n').maps_to("tasks"),
    ParameterSpec::string("ntasks-per-core").maps_to("tasks_per_core"),
    ParameterSpec::string("ntasks-per-gpu").maps_to("tasks_per_gpu"),
    ParameterSpec::string("ntasks-per-node").maps_to("tasks_per_node"),
    ParameterSpec::string("ntasks-per-socket").maps_to("tasks_per_socket"),
    ParameterSpec::choice("open-mode", OPEN_MODES).maps_to("open_mode"),
    ParameterSpec::string("output").short('o').maps_to("standard_output"),
    ParameterSpec::flag("overcommit").short('O'),
    ParameterSpec::alias("oversubscribe", "exclusive", "oversubscribe").short('s'),
    ParameterSpec::flag("parsable"),
    ParameterSpec::string("partition").short('p').maps_to("partition"),
    ParameterSpec::string("power").maps_to("power_flags"),
    ParameterSpec::string("priority").maps_to("priority"),
    ParameterSpec::string("profile").maps_to("profile"),
    ParameterSpec::optional("propagate", "ALL"),
    ParameterSpec::string("qos").short('q').maps_to("qos"),
    ParameterSpec::flag("quiet").short('Q'),
    ParameterSpec::flag("reboot").maps_to("reboot"),
    ParameterSpec::flag("requeue").maps_to("requeue"),
    ParameterSpec::string("reservation").maps_to("reservation"),
    ParameterSpec::string("signal").maps_to("signal"),
    ParameterSpec::string("sockets-per-node").maps_to("sockets_per_node"),
    ParameterSpec::flag("spread-job").maps_to("spread_job"),
    ParameterSpec::string("switches").maps_to("required_switches"),
    ParameterSpec::flag("test-only"),
    ParameterSpec::string("thread-spec").maps_to("thread_specification"),
    ParameterSpec::string("threads-per-core").maps_to("threads_per_core"),
    ParameterSpec::string("time").short('t').maps_to("time_limit"),
    ParameterSpec::string("time-min").maps_to("time_minimum"),
    ParameterSpec::string("tmp").maps_to("temporary_disk_per_node"),
    ParameterSpec::string("uid").maps_to("user_id"),
    ParameterSpec::flag("use-min-nodes"),
    ParameterSpec::flag("verbose").short('v'),
    ParameterSpec::flag("wait").short('W').maps_to("wait"),
    ParameterSpec::string("wait-all-nodes").maps_to("wait_all_nodes"),
    ParameterSpec::string("wckey").maps_to("wckey"),
    ParameterSpec::string("wrap"),
];
